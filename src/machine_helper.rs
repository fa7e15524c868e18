/// What a state handler tells the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Control {
    /// Keep dispatching.
    Continue,
    /// Out of data: leave all scratch intact and return to the caller.
    Suspend,
    /// The end of the stream was reached in a data state.
    Eof,
}

/// Peek the current code point as `Option<char>` (`None` = EOF),
/// suspending the dispatcher when the stream is out of data.
macro_rules! peek {
    ($slf:expr) => {
        match $slf.stream.peek() {
            crate::stream::Input::Char(c) => Some(c),
            crate::stream::Input::Eof => None,
            crate::stream::Input::Ood => {
                return Ok(crate::machine_helper::Control::Suspend)
            }
        }
    };
}

pub(crate) use peek;

macro_rules! switch_to {
    ($slf:expr, $state:expr) => {{
        $slf.switch_to($state);
        Ok(crate::machine_helper::Control::Continue)
    }};
}

pub(crate) use switch_to;

macro_rules! cont {
    () => {
        Ok(crate::machine_helper::Control::Continue)
    };
}

pub(crate) use cont;

macro_rules! eof {
    () => {
        Ok(crate::machine_helper::Control::Eof)
    };
}

pub(crate) use eof;

macro_rules! whitespace_pat {
    () => {
        '\t' | '\n' | '\x0B' | '\x0C' | ' '
    };
}

pub(crate) use whitespace_pat;
