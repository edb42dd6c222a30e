use crate::effect::storage::{Storage, StorageOp, StoreError};
use crate::effect::{Category, EffectResult, EffectValue};
use crate::error::EffectError;

fn failed(e: StoreError) -> EffectError {
    EffectError::Storage(e.to_string())
}

pub(crate) fn execute(storage: &mut Storage, op: StorageOp) -> EffectResult {
    match op {
        StorageOp::Set { area, key, value } => {
            storage.area_mut(area).set(&key, &value).map_err(failed)?;
            Ok(EffectValue::Text(value))
        }
        StorageOp::Get { area, key } => storage
            .area(area)
            .get(&key)
            .map(EffectValue::MaybeText)
            .map_err(failed),
        StorageOp::Remove { area, key } => {
            storage.area_mut(area).remove(&key).map_err(failed)?;
            Ok(EffectValue::Text(key))
        }
        StorageOp::Clear { area } => {
            storage.area_mut(area).clear().map_err(failed)?;
            Ok(EffectValue::Bool(true))
        }
        StorageOp::Unknown { operation, .. } => Err(super::unknown(Category::Storage, operation)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::storage::{self as fx, MemoryStore, StorageArea};
    use crate::effect::{Effect, EffectOp};

    fn run(storage: &mut Storage, effect: Effect) -> EffectResult {
        let EffectOp::Storage(op) = effect.into_op() else {
            panic!("Expected a storage effect");
        };
        execute(storage, op)
    }

    #[test]
    fn test_areas_are_independent() {
        let mut storage = Storage::in_memory(None);

        assert_eq!(
            run(&mut storage, fx::set_local("theme", "dark")).unwrap(),
            EffectValue::Text("dark".into())
        );
        assert_eq!(
            run(&mut storage, fx::get_local("theme")).unwrap(),
            EffectValue::MaybeText(Some("dark".into()))
        );
        assert_eq!(
            run(&mut storage, fx::get_session("theme")).unwrap(),
            EffectValue::MaybeText(None)
        );
    }

    #[test]
    fn test_remove_and_clear() {
        let mut storage = Storage::in_memory(None);
        run(&mut storage, fx::set_session("a", "1")).unwrap();
        run(&mut storage, fx::set_session("b", "2")).unwrap();

        assert_eq!(
            run(&mut storage, fx::remove_session("a")).unwrap(),
            EffectValue::Text("a".into())
        );
        assert_eq!(storage.area(StorageArea::Session).len(), 1);
        assert_eq!(run(&mut storage, fx::clear_session()).unwrap(), EffectValue::Bool(true));
        assert!(storage.area(StorageArea::Session).is_empty());
    }

    #[test]
    fn test_quota_failure_is_storage_error() {
        let mut storage = Storage::new(
            Box::new(MemoryStore::with_quota(4)),
            Box::new(MemoryStore::new()),
        );
        let err = run(&mut storage, fx::set_local("key", "value")).unwrap_err();
        assert!(matches!(err, EffectError::Storage(msg) if msg.contains("quota exceeded")));
    }
}
