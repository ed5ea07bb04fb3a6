//! Runtime - reactor を所有するコンポーネント
//!
//! # 主要コンポーネント
//! - **Reactor**: タスクキュー + タイマー駆動への軽量ハンドル
//! - **Root**: reactor を所有し、呼び出しスレッドで run() する
//! - **Branch**: 専用スレッドで reactor を回す Root
//! - **RootBuilder**: 設定の検証と構築

mod branch;
mod builder;
mod reactor;
mod root;

pub use self::branch::Branch;
pub use self::builder::{ReactorConfig, RootBuilder};
pub use self::reactor::Reactor;
pub use self::root::Root;
