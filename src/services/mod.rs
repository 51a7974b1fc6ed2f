pub mod creator_service;
pub mod perk_service;
