use std::any::Any;

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    trait Trait: AsAny + Send + Sync {}

    impl Trait for Arc<i32> {}

    #[test]
    fn as_any_downcasts_through_trait_object() {
        let x: Box<dyn Trait> = Box::new(Arc::new(7i32));

        assert_eq!((*x).as_any().downcast_ref::<Arc<i32>>().map(|v| **v), Some(7));
        assert!((*x).as_any().downcast_ref::<i32>().is_none());
    }
}
