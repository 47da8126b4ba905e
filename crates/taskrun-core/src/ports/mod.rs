//! Ports - 外部コラボレータへのインターフェース
//!
//! dispatcher は時刻・warehouse のアイドル判定・実行コンテキストを
//! すべてここの trait 経由で扱います。実装は `impls` に置きます。

pub mod clock;
pub mod context;
pub mod id_generator;
pub mod idle;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::context::ContextHook;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::idle::IdleTracker;
