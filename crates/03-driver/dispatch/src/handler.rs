use transport::Response;

/// A callable bindable under an operation name.
///
/// `Args` is the handler's parameter list as a tuple. The trait is
/// implemented for every `Fn(A1, .., An) -> Response<R>` with `n <= 8`, so
/// plain closures and functions bind without wrapping. Closures usually need an
/// explicit return type (`-> Response<i32>`) so the error type is known.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Success type produced by the handler.
    type Output: Send + 'static;

    /// Invokes the handler with an unpacked argument tuple.
    fn call(&self, args: Args) -> Response<Self::Output>;
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Handler<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> Response<R> + Send + Sync + 'static,
            R: Send + 'static,
        {
            type Output = R;

            #[allow(non_snake_case)]
            fn call(&self, ($($arg,)*): ($($arg,)*)) -> Response<R> {
                (self)($($arg),*)
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
impl_handler!(A1, A2, A3, A4, A5, A6, A7);
impl_handler!(A1, A2, A3, A4, A5, A6, A7, A8);
