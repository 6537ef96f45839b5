pub(crate) mod list;
pub(crate) mod meta;
pub(crate) mod sync;
pub(crate) mod validate;
