pub mod inventory_analysis;
