//! arbor-core
//!
//! Component tree and reactor plumbing for tree-structured async applications.
//!
//! # モジュール構成
//! - **component**: 所有ツリー（Component, AsComponent, Dispatch）
//! - **runtime**: reactor を所有するノード（Root, Branch, Reactor, RootBuilder）
//! - **callback**: 呼び出し方を隠蔽したコールバック（Direct / Deferred / List）
//! - **timer**: 再始動できるワンショットタイマー
//! - **error**: エラー型
//!
//! # 使用例
//! ```no_run
//! use std::sync::Arc;
//! use arbor_core::{AsComponent, Component, DeferredCallback, Root};
//!
//! struct Greeter {
//!     component: Component,
//! }
//!
//! impl Greeter {
//!     fn greet(&self, name: String) {
//!         println!("hello, {name}");
//!     }
//! }
//!
//! impl AsComponent for Greeter {
//!     fn as_component(&self) -> &Component {
//!         &self.component
//!     }
//! }
//!
//! let root = Root::new()?;
//! let greeter = Arc::new(Greeter { component: Component::new(&root) });
//! let greet = DeferredCallback::bind(&greeter, Greeter::greet);
//! greet.call("arbor".to_string())?;
//!
//! let reactor = root.context();
//! root.post(move || reactor.stop());
//! root.run();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod callback;
pub mod component;
pub mod error;
pub mod runtime;
pub mod timer;

pub use callback::{Callback, CallbackList, DeferredCallback, DirectCallback, Invoke};
pub use component::{AsComponent, Component, ComponentId, Dispatch};
pub use error::{CallbackError, ReactorError, TreeError};
pub use runtime::{Branch, Reactor, ReactorConfig, Root, RootBuilder};
pub use timer::Timer;
