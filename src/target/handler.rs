/// A plain function that can be wrapped
///
/// This is implemented for any `Fn(T1, .., Tn) -> R` with up to 12 arguments.
/// Arguments are passed to the wrapper as a tuple `(T1, .., Tn)`.
pub trait Callable<A>: Send + Sync + 'static {
    type Output;

    fn call(&self, args: A) -> Self::Output;
}

/// A function taking a receiver as its first argument
///
/// This is implemented for any `Fn(&C, T1, .., Tn) -> R` with up to 12 arguments
/// after the receiver. The receiver is given per call, not when wrapping.
pub trait Method<C, A>: Send + Sync + 'static {
    type Output;

    fn call(&self, receiver: &C, args: A) -> Self::Output;
}

macro_rules! impl_callable {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused)]
        impl<F, R, $($ty,)*> Callable<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> R + Send + Sync + 'static,
        {
            type Output = R;

            fn call(&self, args: ($($ty,)*)) -> R {
                let ($($ty,)*) = args;
                (self)($($ty,)*)
            }
        }

        #[allow(non_snake_case, unused)]
        impl<F, C, R, $($ty,)*> Method<C, ($($ty,)*)> for F
        where
            F: Fn(&C, $($ty,)*) -> R + Send + Sync + 'static,
        {
            type Output = R;

            fn call(&self, receiver: &C, args: ($($ty,)*)) -> R {
                let ($($ty,)*) = args;
                (self)(receiver, $($ty,)*)
            }
        }
    };
}

impl_callable!();
impl_callable!(T1);
impl_callable!(T1, T2);
impl_callable!(T1, T2, T3);
impl_callable!(T1, T2, T3, T4);
impl_callable!(T1, T2, T3, T4, T5);
impl_callable!(T1, T2, T3, T4, T5, T6);
impl_callable!(T1, T2, T3, T4, T5, T6, T7);
impl_callable!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_callable!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_callable!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_callable!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_callable!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
