pub mod buckets;
pub mod grants;
pub mod health;
pub mod objects;
