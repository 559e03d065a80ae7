use std::cell::Cell;

use cadpick_core::document::{Document, Entity, EntityId, EntityState};
use tracing::{debug, trace};

use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ForRead,
    /// 文档以只读方式借出，写模式只做图层锁定校验。
    ForWrite,
}

/// 事务的发放者，统计开启、提交与中止的次数。
#[derive(Debug, Default)]
pub struct TransactionManager {
    started: Cell<u64>,
    committed: Cell<u64>,
    aborted: Cell<u64>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_transaction<'a>(&'a self, document: &'a Document) -> Transaction<'a> {
        let serial = self.started.get() + 1;
        self.started.set(serial);
        debug!(serial, "开启事务");
        Transaction {
            document,
            manager: self,
            serial,
            opened: Cell::new(0),
            state: TransactionState::Active,
        }
    }

    #[inline]
    pub fn started_count(&self) -> u64 {
        self.started.get()
    }

    #[inline]
    pub fn committed_count(&self) -> u64 {
        self.committed.get()
    }

    #[inline]
    pub fn aborted_count(&self) -> u64 {
        self.aborted.get()
    }

    #[inline]
    pub fn active_count(&self) -> u64 {
        self.started.get() - self.committed.get() - self.aborted.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// 限定对象解析范围的事务。未提交即被丢弃时自动中止。
#[derive(Debug)]
pub struct Transaction<'a> {
    document: &'a Document,
    manager: &'a TransactionManager,
    serial: u64,
    opened: Cell<usize>,
    state: TransactionState,
}

impl<'a> Transaction<'a> {
    /// 按 ID 打开实体。
    pub fn get_object(&self, id: EntityId, mode: OpenMode) -> Result<&'a Entity, EngineError> {
        let entity = match self.document.entity_state(id) {
            EntityState::Live(entity) => entity,
            EntityState::Erased => return Err(EngineError::WasErased(id.get())),
            EntityState::Missing => return Err(EngineError::EntityNotFound(id.get())),
        };
        if mode == OpenMode::ForWrite && self.document.is_layer_locked(entity.layer_name()) {
            return Err(EngineError::OnLockedLayer {
                id: id.get(),
                layer: entity.layer_name().to_string(),
            });
        }
        self.opened.set(self.opened.get() + 1);
        trace!(serial = self.serial, id = id.get(), ?mode, kind = entity.class_name(), "打开实体");
        Ok(entity)
    }

    #[inline]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// 本事务中成功打开的对象数。
    #[inline]
    pub fn objects_opened(&self) -> usize {
        self.opened.get()
    }

    pub fn commit(mut self) {
        self.finish(TransactionState::Committed);
    }

    pub fn abort(mut self) {
        self.finish(TransactionState::Aborted);
    }

    fn finish(&mut self, outcome: TransactionState) {
        if self.state != TransactionState::Active {
            return;
        }
        self.state = outcome;
        let counter = match outcome {
            TransactionState::Committed => &self.manager.committed,
            TransactionState::Aborted => &self.manager.aborted,
            TransactionState::Active => return,
        };
        counter.set(counter.get() + 1);
        debug!(
            serial = self.serial,
            opened = self.opened.get(),
            ?outcome,
            "结束事务"
        );
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.finish(TransactionState::Aborted);
    }
}

#[cfg(test)]
mod tests {
    use cadpick_core::geometry::{Point2, Point3};

    use super::*;

    #[test]
    fn get_object_reports_missing_erased_and_locked() {
        let mut document = Document::new();
        let live = document.add_line(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            "LOCKED",
        );
        let erased = document.add_circle(Point2::new(0.0, 0.0), 1.0, "0");
        document.erase(erased);
        document.set_layer_locked("LOCKED", true);

        let manager = TransactionManager::new();
        let transaction = manager.start_transaction(&document);

        assert!(matches!(
            transaction.get_object(live, OpenMode::ForRead),
            Ok(Entity::Line(_))
        ));
        assert!(matches!(
            transaction.get_object(live, OpenMode::ForWrite),
            Err(EngineError::OnLockedLayer { .. })
        ));
        assert!(matches!(
            transaction.get_object(erased, OpenMode::ForRead),
            Err(EngineError::WasErased(id)) if id == erased.get()
        ));
        assert!(matches!(
            transaction.get_object(EntityId::new(77), OpenMode::ForRead),
            Err(EngineError::EntityNotFound(77))
        ));
        assert_eq!(transaction.objects_opened(), 1);
        transaction.commit();

        assert_eq!(manager.started_count(), 1);
        assert_eq!(manager.committed_count(), 1);
        assert_eq!(manager.aborted_count(), 0);
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn dropping_an_active_transaction_aborts_it() {
        let document = Document::new();
        let manager = TransactionManager::new();
        {
            let transaction = manager.start_transaction(&document);
            assert_eq!(transaction.serial(), 1);
            assert_eq!(manager.active_count(), 1);
        }
        assert_eq!(manager.aborted_count(), 1);

        manager.start_transaction(&document).abort();
        manager.start_transaction(&document).commit();
        assert_eq!(manager.started_count(), 3);
        assert_eq!(manager.aborted_count(), 2);
        assert_eq!(manager.committed_count(), 1);
        assert_eq!(manager.active_count(), 0);
    }
}
