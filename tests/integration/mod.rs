mod cache_flows;
mod execution_flows;
