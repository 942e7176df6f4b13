//! Input, output and error channels of a command tree.
//!
//! Each channel defaults to the process stream and can be replaced
//! independently, typically with a [`SharedBuffer`] in tests.

use std::cell::RefCell;
use std::fmt::{self, Display};
use std::io::{self, Read, Write};
use std::rc::Rc;

/// The three data channels a command talks to.
pub struct Streams {
    input: RefCell<Box<dyn Read>>,
    out: RefCell<Box<dyn Write>>,
    err: RefCell<Box<dyn Write>>,
}

impl Default for Streams {
    fn default() -> Self {
        Self {
            input: RefCell::new(Box::new(io::stdin())),
            out: RefCell::new(Box::new(io::stdout())),
            err: RefCell::new(Box::new(io::stderr())),
        }
    }
}

impl fmt::Debug for Streams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streams").finish_non_exhaustive()
    }
}

impl Streams {
    pub fn set_input(&mut self, input: impl Read + 'static) {
        self.input = RefCell::new(Box::new(input));
    }

    pub fn set_output(&mut self, out: impl Write + 'static) {
        self.out = RefCell::new(Box::new(out));
    }

    pub fn set_error(&mut self, err: impl Write + 'static) {
        self.err = RefCell::new(Box::new(err));
    }

    /// Reads the whole input channel into a string.
    pub fn read_to_string(&self) -> io::Result<String> {
        let mut buf = String::new();
        self.input.borrow_mut().read_to_string(&mut buf)?;
        Ok(buf)
    }

    pub fn print(&self, text: impl Display) -> io::Result<()> {
        write!(self.out.borrow_mut(), "{text}")
    }

    pub fn println(&self, text: impl Display) -> io::Result<()> {
        writeln!(self.out.borrow_mut(), "{text}")
    }

    pub fn eprint(&self, text: impl Display) -> io::Result<()> {
        write!(self.err.borrow_mut(), "{text}")
    }

    pub fn eprintln(&self, text: impl Display) -> io::Result<()> {
        writeln!(self.err.borrow_mut(), "{text}")
    }

    /// Flushes output and error channels.
    pub fn flush(&self) -> io::Result<()> {
        self.out.borrow_mut().flush()?;
        self.err.borrow_mut().flush()
    }
}

/// Cloneable in-memory writer whose contents stay readable after the
/// streams take ownership of a clone.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{SharedBuffer, Streams};
///
/// let out = SharedBuffer::default();
/// let mut streams = Streams::default();
/// streams.set_output(out.clone());
/// streams.println("hello").unwrap();
/// assert_eq!(out.contents(), "hello\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    /// Buffered bytes as (lossy) UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_are_independent() {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let mut streams = Streams::default();
        streams.set_output(out.clone());
        streams.set_error(err.clone());

        streams.print("a").unwrap();
        streams.eprintln("b").unwrap();

        assert_eq!(out.contents(), "a");
        assert_eq!(err.contents(), "b\n");
    }

    #[test]
    fn test_input_override() {
        let mut streams = Streams::default();
        streams.set_input(io::Cursor::new(b"piped".to_vec()));
        assert_eq!(streams.read_to_string().unwrap(), "piped");
    }
}
