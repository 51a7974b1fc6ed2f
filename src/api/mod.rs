pub mod health;
pub mod perks;
pub mod swagger;
