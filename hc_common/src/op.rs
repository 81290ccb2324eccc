//! Helper macros for deriving arithmetic operators on integer newtypes.
//!
//! The newtype must provide `value() -> i64` and `From<i64>`.

#[macro_export]
macro_rules! op {
    (binary $t:ty, $op:ident, $method:ident) => {
        impl std::ops::$op for $t {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self::from(std::ops::$op::$method(self.value(), rhs.value()))
            }
        }
    };
    (inplace $t:ty, AddAssign, add_assign) => {
        impl std::ops::AddAssign for $t {
            fn add_assign(&mut self, rhs: Self) {
                *self = Self::from(self.value() + rhs.value());
            }
        }
    };
    (inplace $t:ty, SubAssign, sub_assign) => {
        impl std::ops::SubAssign for $t {
            fn sub_assign(&mut self, rhs: Self) {
                *self = Self::from(self.value() - rhs.value());
            }
        }
    };
    (unary $t:ty, $op:ident, $method:ident) => {
        impl std::ops::$op for $t {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self::from(std::ops::$op::$method(self.value()))
            }
        }
    };
}
