use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=ENVIRONMENT");

    // ビルド時に ENVIRONMENT が指定された場合のみ実行環境を埋め込む
    // 未指定なら実行時の ENVIRONMENT とビルド設定で判定される
    match env::var("ENVIRONMENT").as_deref() {
        Ok(environment @ ("production" | "development")) => {
            println!("cargo:rustc-env=EMBEDDED_ENVIRONMENT={environment}");
        }
        Ok(other) => {
            println!("cargo:warning=不明なENVIRONMENT: {other}（埋め込みをスキップします）");
        }
        Err(_) => {}
    }
}
