pub(crate) mod admin;
pub(crate) mod browse;
pub(crate) mod catalog;
pub(crate) mod lookup;
