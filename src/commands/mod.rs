pub type CmdResult<T> = riverbed_supply::Result<(T, i32)>;

pub mod supply;
