pub mod buffer;
pub mod io;
pub mod messages;

pub use self::buffer::{Buffer, Event};
pub use self::io::{ChannelInput, MidiInput, MidiOutput, NullOutput};
pub use self::messages::{Message, U14, U4, U7};
