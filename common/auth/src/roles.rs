pub const ROLE_BUYER: &str = "buyer";
pub const ROLE_SELLER: &str = "seller";
pub const ROLE_ADMIN: &str = "admin";

pub const ALL_ROLES: &[&str] = &[ROLE_BUYER, ROLE_SELLER, ROLE_ADMIN];
