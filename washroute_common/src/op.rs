//! Operator boilerplate for single-field integer newtypes.
//!
//! ```ignore
//! newtype_ops!(Money {
//!     binary: [Add::add, Sub::sub],
//!     assign: [AddAssign::add_assign],
//!     unary: [Neg::neg],
//! });
//! ```

#[macro_export]
macro_rules! newtype_ops {
    ($ty:ident {
        binary: [$($bin_trait:ident::$bin_fn:ident),* $(,)?],
        assign: [$($asg_trait:ident::$asg_fn:ident),* $(,)?],
        unary: [$($un_trait:ident::$un_fn:ident),* $(,)?] $(,)?
    }) => {
        $(
            impl $bin_trait for $ty {
                type Output = Self;

                fn $bin_fn(self, rhs: Self) -> Self::Output {
                    Self(self.0.$bin_fn(rhs.0))
                }
            }
        )*
        $(
            impl $asg_trait for $ty {
                fn $asg_fn(&mut self, rhs: Self) {
                    self.0.$asg_fn(rhs.0)
                }
            }
        )*
        $(
            impl $un_trait for $ty {
                type Output = Self;

                fn $un_fn(self) -> Self::Output {
                    Self(self.0.$un_fn())
                }
            }
        )*
    };
}
