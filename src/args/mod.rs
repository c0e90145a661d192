//! CLI argument types and parsing helpers.
mod cli;
pub(crate) mod parsers;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use cli::{
    Command, ConnectivityArgs, EndpointArgs, OutputFormat, ProbeArgs, RequestArgs, RunArgs,
    StressArgs,
};
pub(crate) use parsers::parse_header;
