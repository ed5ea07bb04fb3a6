//! Callback family.
//!
//! - **Callback**: 型消去されたハンドル（未束縛なら呼び出しは失敗する）
//! - **DirectCallback**: 呼び出し元のスレッドで即座に実行
//! - **DeferredCallback**: 相手の reactor に post して後で実行
//! - **CallbackList**: 登録順にすべてのメンバーを呼ぶ

mod base;
mod deferred;
mod direct;
mod list;

pub use self::base::{Callback, Invoke};
pub use self::deferred::DeferredCallback;
pub use self::direct::DirectCallback;
pub use self::list::CallbackList;
