mod record;

pub use self::record::{Outcome, Record};
pub(crate) use self::record::ResultRow;
