pub mod dataset;
pub mod network;

#[cfg(test)]
mod tests;
