pub(crate) mod email;

pub(crate) use email::{domain_of, normalize_address};
