use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use travel_audit::features::audit::{
    self, category_breakdown, sort_for_ledger, total_amount, AuditFlag, TripSummary,
};
use travel_audit::features::expenses::{
    self, CreateExpenseDto, Expense, ExpenseCategory, UpdateExpenseDto,
};
use travel_audit::features::records::{MutationEvent, RecordStore};
use travel_audit::features::sheets::SheetBackend;
use travel_audit::features::trips::{self, CreateTripDto, Trip, TripStatus, UpdateTripDto};
use travel_audit::shared::errors::{report_error, AppError, AppResult};
use travel_audit::shared::utils::{format_date, today_jst};

#[derive(Parser)]
#[command(name = "travel-audit")]
#[command(about = "旅行の予算と支出を記録・監査する")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 旅行の管理
    Trips {
        #[command(subcommand)]
        action: TripAction,
    },
    /// 支出の管理
    Expenses {
        #[command(subcommand)]
        action: ExpenseAction,
    },
    /// 旅行の予算消化・カテゴリ内訳・監査台帳を表示する
    Summary {
        #[arg(long)]
        trip: String,
    },
    /// 支出をCSVに書き出す
    Export {
        /// 出力先（ディレクトリの場合は travel_audit_YYYYMMDD.csv を作成）
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// 対象の旅行ID（省略時は全件）
        #[arg(long)]
        trip: Option<String>,
    },
}

#[derive(Subcommand)]
enum TripAction {
    /// 全旅行を表示する
    List,
    /// 支出を記録できる旅行（Active / Planning）を表示する
    Open,
    /// 旅行を作成する
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value_t = 0)]
        budget: i64,
        #[arg(long, default_value = "")]
        detail: String,
    },
    /// 旅行情報を更新する（省略した項目は現在の値のまま）
    Update {
        trip_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        status: Option<TripStatus>,
        #[arg(long)]
        budget: Option<i64>,
        #[arg(long)]
        detail: Option<String>,
    },
    /// 旅行と関連する全支出を削除する
    Delete {
        trip_id: String,
        /// 確認のため旅行名を入力する
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Subcommand)]
enum ExpenseAction {
    /// 支出を表示する
    List {
        #[arg(long)]
        trip: Option<String>,
    },
    /// 支出を記録する
    Add {
        #[arg(long)]
        trip: String,
        /// 食事 / 宿泊 / 交通 / 娯楽/体験 / 雑費
        #[arg(long)]
        category: ExpenseCategory,
        #[arg(long)]
        item: String,
        #[arg(long)]
        amount: i64,
        /// 満足度（1〜10）
        #[arg(long, default_value_t = 5)]
        satisfaction: u8,
        #[arg(long, default_value = "")]
        detail: String,
        /// 支払日（省略時は今日）
        #[arg(long)]
        date: Option<NaiveDate>,
        /// 浪費として記録する
        #[arg(long)]
        waste: bool,
        /// 未評価として記録する（後で採点する）
        #[arg(long)]
        pending: bool,
    },
    /// 支出を更新する（省略した項目は現在の値のまま）
    Update {
        entry_id: String,
        #[arg(long)]
        category: Option<ExpenseCategory>,
        #[arg(long)]
        item: Option<String>,
        #[arg(long)]
        amount: Option<i64>,
        #[arg(long)]
        satisfaction: Option<u8>,
        #[arg(long)]
        detail: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        waste: Option<bool>,
        #[arg(long)]
        pending: bool,
    },
    /// 支出を削除する
    Delete { entry_id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let context = match travel_audit::bootstrap().await {
        Ok(context) => context,
        Err(e) => {
            eprintln!("起動に失敗しました: {}", report_error(&e));
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &context.store).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("エラー: {}", report_error(&e));
            if let AppError::CascadeInterrupted { staged_rows, .. } = &e {
                eprintln!("書き戻されていない支出行（{}件）:", staged_rows.len());
                match serde_json::to_string_pretty(staged_rows) {
                    Ok(json) => eprintln!("{json}"),
                    Err(json_err) => eprintln!("{staged_rows:?} ({json_err})"),
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run<B: SheetBackend>(command: Commands, store: &RecordStore<B>) -> AppResult<()> {
    match command {
        Commands::Trips { action } => run_trip(action, store).await,
        Commands::Expenses { action } => run_expense(action, store).await,
        Commands::Summary { trip } => print_summary(store, &trip).await,
        Commands::Export { out, trip } => {
            let mut expenses = expenses::find_all(store).await?;
            if let Some(trip_id) = trip {
                expenses.retain(|e| e.trip_id == trip_id);
            }
            let path = if out.is_dir() {
                out.join(audit::export_filename(today_jst()))
            } else {
                out
            };
            let written = audit::write_csv(&path, &expenses)?;
            println!("{written}件を書き出しました: {}", path.display());
            Ok(())
        }
    }
}

async fn run_trip<B: SheetBackend>(action: TripAction, store: &RecordStore<B>) -> AppResult<()> {
    match action {
        TripAction::List => print_trips(&trips::find_all(store).await?),
        TripAction::Open => print_trips(&trips::find_open(store).await?),
        TripAction::Add {
            name,
            start,
            end,
            budget,
            detail,
        } => {
            let (trip, event) = trips::create(
                store,
                CreateTripDto {
                    trip_name: name,
                    start_date: start,
                    end_date: end,
                    total_budget: budget,
                    detail,
                },
            )
            .await?;
            println!("旅行を作成しました: {} ({})", trip.trip_name, trip.trip_id);
            print_event(&event);
        }
        TripAction::Update {
            trip_id,
            name,
            start,
            end,
            status,
            budget,
            detail,
        } => {
            let current = trips::find_by_id(store, &trip_id).await?;
            let dto = UpdateTripDto {
                trip_name: name.unwrap_or(current.trip_name),
                start_date: start.or(current.start_date).unwrap_or_else(today_jst),
                end_date: end.or(current.end_date).unwrap_or_else(today_jst),
                status: status.unwrap_or(current.status),
                total_budget: budget.unwrap_or(current.total_budget as i64),
                detail: detail.unwrap_or(current.detail),
            };
            let event = trips::update(store, &trip_id, dto).await?;
            println!("旅行情報を更新しました");
            print_event(&event);
        }
        TripAction::Delete { trip_id, confirm } => {
            let event = trips::delete_confirmed(store, &trip_id, &confirm).await?;
            println!("旅行を完全削除しました");
            print_event(&event);
        }
    }
    Ok(())
}

async fn run_expense<B: SheetBackend>(
    action: ExpenseAction,
    store: &RecordStore<B>,
) -> AppResult<()> {
    match action {
        ExpenseAction::List { trip } => {
            let mut list = match trip {
                Some(trip_id) => expenses::find_by_trip(store, &trip_id).await?,
                None => expenses::find_all(store).await?,
            };
            sort_for_ledger(&mut list);
            print_ledger(&list);
            let total = total_amount(&list);
            println!("表示範囲の支出合計: {}", yen(total));
        }
        ExpenseAction::Add {
            trip,
            category,
            item,
            amount,
            satisfaction,
            detail,
            date,
            waste,
            pending,
        } => {
            let (expense, event) = expenses::create(
                store,
                CreateExpenseDto {
                    trip_id: trip,
                    category,
                    item_name: item,
                    amount,
                    satisfaction: if pending { 0 } else { satisfaction },
                    detail,
                    expense_date: date,
                    is_waste: waste,
                },
            )
            .await?;
            println!(
                "記録しました: {} {} {}",
                expense.item_name,
                yen(expense.amount),
                expense.entry_id
            );
            if expense.satisfaction.is_pending() {
                println!("満足度は未評価です。後で採点してください");
            }
            print_event(&event);
        }
        ExpenseAction::Update {
            entry_id,
            category,
            item,
            amount,
            satisfaction,
            detail,
            date,
            waste,
            pending,
        } => {
            let current = expenses::find_by_id(store, &entry_id).await?;
            let satisfaction = if pending {
                0
            } else {
                satisfaction.unwrap_or(current.satisfaction.value())
            };
            let dto = UpdateExpenseDto {
                category: category.unwrap_or(current.category),
                item_name: item.unwrap_or(current.item_name),
                amount: amount.unwrap_or(current.amount as i64),
                satisfaction,
                detail: detail.unwrap_or(current.detail),
                expense_date: date.or(current.expense_date).unwrap_or_else(today_jst),
                is_waste: waste.unwrap_or(current.is_waste),
            };
            let event = expenses::update(store, &entry_id, dto).await?;
            println!("支出を更新しました");
            print_event(&event);
        }
        ExpenseAction::Delete { entry_id } => {
            let event = expenses::delete(store, &entry_id).await?;
            println!("支出を削除しました");
            print_event(&event);
        }
    }
    Ok(())
}

async fn print_summary<B: SheetBackend>(store: &RecordStore<B>, trip_id: &str) -> AppResult<()> {
    let trip = trips::find_by_id(store, trip_id).await?;
    let mut list = expenses::find_by_trip(store, trip_id).await?;
    let summary = TripSummary::compute(&trip, &list);

    println!("■ {} ({}) [{}]", trip.trip_name, trip.trip_id, trip.status);
    println!(
        "支出合計: {} / 予算: {} ({}%){}",
        yen(summary.total_spent),
        yen(summary.budget),
        summary.consumption_percent,
        if summary.over_budget { " 予算超過" } else { "" }
    );
    println!("予算残: {}", signed_yen(summary.remaining));
    println!("総浪費額: {}", yen(summary.total_waste));
    println!("未評価: {}件", summary.pending_count);

    let shares = category_breakdown(&list);
    if !shares.is_empty() {
        println!("カテゴリ別内訳:");
        for share in shares {
            println!("  {:<16} {}", share.label(), yen(share.amount));
        }
    }

    sort_for_ledger(&mut list);
    println!("監査台帳:");
    print_ledger(&list);
    Ok(())
}

fn print_trips(trips: &[Trip]) {
    if trips.is_empty() {
        println!("旅行がありません");
        return;
    }
    for trip in trips {
        println!(
            "{}  {:<9} {}  {}〜{}  予算 {}",
            trip.trip_id,
            trip.status.as_str(),
            trip.trip_name,
            trip.start_date.map(format_date).unwrap_or_default(),
            trip.end_date.map(format_date).unwrap_or_default(),
            yen(trip.total_budget)
        );
    }
}

fn print_ledger(list: &[Expense]) {
    if list.is_empty() {
        println!("  支出データがまだありません");
        return;
    }
    for expense in list {
        let flag = AuditFlag::classify(expense);
        println!(
            "  {}  {:<6} {:<20} {:>10}  満足度{:>2}  {}  {}",
            expense.expense_date.map(format_date).unwrap_or_default(),
            expense.category.label(),
            expense.item_name,
            yen(expense.amount),
            expense.satisfaction.value(),
            flag.label(),
            expense.entry_id
        );
    }
}

fn print_event(event: &MutationEvent) {
    log::debug!("ミューテーション: {event:?}");
    if let Some(report) = &event.cascade {
        println!(
            "削除した支出: {}件 / 残した支出: {}件",
            report.removed_expenses, report.kept_expenses
        );
    }
}

/// 桁区切り付きの円表記
fn yen(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('¥');
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn signed_yen(amount: i64) -> String {
    if amount < 0 {
        format!("-{}", yen(amount.unsigned_abs()))
    } else {
        yen(amount as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_expense_add() {
        let cli = Cli::try_parse_from([
            "travel-audit",
            "expenses",
            "add",
            "--trip",
            "a1b2c3d4",
            "--category",
            "食事",
            "--item",
            "ラーメン",
            "--amount",
            "3000",
            "--date",
            "2024-12-01",
        ])
        .unwrap();

        match cli.command {
            Commands::Expenses {
                action:
                    ExpenseAction::Add {
                        category, amount, date, satisfaction, ..
                    },
            } => {
                assert_eq!(category, ExpenseCategory::Food);
                assert_eq!(amount, 3000);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 12, 1));
                assert_eq!(satisfaction, 5);
            }
            _ => panic!("expenses add として解析されませんでした"),
        }
    }

    #[test]
    fn test_yen() {
        assert_eq!(yen(0), "¥0");
        assert_eq!(yen(50000), "¥50,000");
        assert_eq!(yen(1234567), "¥1,234,567");
        assert_eq!(signed_yen(-1000), "-¥1,000");
    }
}
