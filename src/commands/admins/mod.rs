pub(crate) mod clear;
