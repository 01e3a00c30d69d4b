mod flows;
mod replay_test;
#[cfg(test)]
pub mod util;
