pub mod split;
pub mod which;
