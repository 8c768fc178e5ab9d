pub mod derive;
pub mod doctor;
pub mod replay;
pub mod run;
pub mod validate;
