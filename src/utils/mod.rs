pub mod act;
