pub const DEFAULT_SERVER_PORT: u16 = 2000;
