use std::any::Any;
use std::sync::Arc;

use crate::container::{Bean, Managed};

/// Downcasts a shared managed instance to its concrete type.
pub fn downcast_arc<T: Managed>(bean: &Bean) -> Option<Arc<T>> {
    Arc::clone(bean).into_any_arc().downcast::<T>().ok()
}

pub trait DowncastRef {
    fn is<T: Any>(&self) -> bool;

    fn downcast_ref<T: Any>(&self) -> Option<&T>;
}

impl DowncastRef for dyn Managed {
    #[inline]
    fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[inline]
    fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_arc_succeeds_when_types_match() {
        let bean: Bean = Arc::new(42i32);

        let typed = downcast_arc::<i32>(&bean).unwrap();
        assert_eq!(*typed, 42);

        assert!(downcast_arc::<String>(&bean).is_none());
    }

    #[test]
    fn downcast_ref_succeeds_when_receiver_is_a_ref() {
        let bean: Bean = Arc::new(String::from("managed"));
        let instance: &dyn Managed = bean.as_ref();

        assert!(instance.is::<String>());
        assert_eq!(instance.downcast_ref::<String>().map(String::as_str), Some("managed"));
        assert!(instance.downcast_ref::<i32>().is_none());
    }
}
