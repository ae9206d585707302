use crate::errors::PresaleError;
use anchor_lang::solana_program::msg;
use std::panic::Location;

pub trait SafeMath: Sized {
    fn safe_add(self, rhs: Self) -> Result<Self, PresaleError>;
    fn safe_sub(self, rhs: Self) -> Result<Self, PresaleError>;
    fn safe_mul(self, rhs: Self) -> Result<Self, PresaleError>;
    fn safe_div(self, rhs: Self) -> Result<Self, PresaleError>;
}

fn overflow(caller: &Location) -> PresaleError {
    msg!("Math error thrown at {}:{}", caller.file(), caller.line());
    PresaleError::ArithmeticOverflow
}

macro_rules! checked_impl {
    ($t:ty) => {
        impl SafeMath for $t {
            #[track_caller]
            fn safe_add(self, v: $t) -> Result<$t, PresaleError> {
                match self.checked_add(v) {
                    Some(result) => Ok(result),
                    None => Err(overflow(Location::caller())),
                }
            }

            #[track_caller]
            fn safe_sub(self, v: $t) -> Result<$t, PresaleError> {
                match self.checked_sub(v) {
                    Some(result) => Ok(result),
                    None => Err(overflow(Location::caller())),
                }
            }

            #[track_caller]
            fn safe_mul(self, v: $t) -> Result<$t, PresaleError> {
                match self.checked_mul(v) {
                    Some(result) => Ok(result),
                    None => Err(overflow(Location::caller())),
                }
            }

            #[track_caller]
            fn safe_div(self, v: $t) -> Result<$t, PresaleError> {
                match self.checked_div(v) {
                    Some(result) => Ok(result),
                    None => Err(overflow(Location::caller())),
                }
            }
        }
    };
}

checked_impl!(u64);
checked_impl!(i64);

pub trait SafeCast<T>: Sized {
    fn safe_cast(self) -> Result<T, PresaleError>;
}

macro_rules! try_into_impl {
    ($t:ty, $v:ty) => {
        impl SafeCast<$v> for $t {
            #[track_caller]
            fn safe_cast(self) -> Result<$v, PresaleError> {
                match self.try_into() {
                    Ok(result) => Ok(result),
                    Err(_) => Err(overflow(Location::caller())),
                }
            }
        }
    };
}

try_into_impl!(i64, u64);
