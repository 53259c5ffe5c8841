/// 機能別モジュール
///
/// 各機能モジュールは、その機能に関連するモデルとデータ操作を含む自己完結型のユニットです。
/// `sheets` が行ストアを、`records` がその上のキャッシュ・リトライ付きレコードストアを提供し、
/// `trips` / `expenses` / `audit` はレコードストアの上に構築されます。
pub mod audit;
pub mod expenses;
pub mod records;
pub mod sheets;
pub mod trips;
