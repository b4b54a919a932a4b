mod bus;
mod sg;
