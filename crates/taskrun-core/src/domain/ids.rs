//! Domain identifiers (strongly-typed IDs).
//!
//! Task / query の ID は ULID ベースの `Id<T>` で表現します。
//! `T` は PhantomData のマーカー型なので、`TaskId` と `QueryId` は
//! 同じ表現のまま混同できません。
//!
//! Warehouse（リソースプール）の ID は上流スケジューラが採番する数値なので、
//! 単純な newtype にしています。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"task-", "query-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Task のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Query（= 1 回の実行）のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Query {}

impl IdMarker for Query {
    fn prefix() -> &'static str {
        "query-"
    }
}

/// Identifier of a Task (the scheduled definition a run belongs to).
pub type TaskId = Id<Task>;

/// Identifier of one run of a Task.
pub type QueryId = Id<Query>;

/// Identifier of the warehouse (resource pool) a run executes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(u64);

impl WarehouseId {
    /// The warehouse runs fall back to when the scheduler does not pick one.
    pub const DEFAULT: WarehouseId = WarehouseId(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Default for WarehouseId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for WarehouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warehouse-{}", self.0)
    }
}
