pub mod datamatrix;
pub mod graph_service;
pub mod inspection_service;
