pub mod mock;
pub mod neynar;
