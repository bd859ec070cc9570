//! 便捷宏

/// 构造 [`ParametersHolder`](crate::ParametersHolder)
///
/// ```
/// use di_core::parameters_of;
///
/// let params = parameters_of![8080u16, "localhost".to_string()];
/// assert_eq!(*params.get::<u16>().unwrap(), 8080);
/// ```
#[macro_export]
macro_rules! parameters_of {
    () => {
        $crate::ParametersHolder::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::ParametersHolder::new()$(.with($value))+
    };
}
