//! Interactive command loop.
//!
//! Input is consumed one byte at a time. Whitespace separates commands and
//! every newline prints the prompt. A malformed command reports the byte
//! that broke it on the error stream and discards the rest of its line.
//!
//! ```text
//! m A 10   allocate 10 bytes for A     f A   free A
//! t        toggle strategy             s     list identifiers
//! h        help                        q     quit
//! ```

use std::io::{self, Bytes, Read, Write};

use log::info;
use tas::arena::Heap;

use crate::identifiers::{BindError, Identifiers};
use crate::render::{render, Palette};

const PROMPT: &str = "> ";

/// How a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// The `q` command.
    Quit,
    /// Input ran out before `q`.
    EndOfInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Help,
    Status,
    Quit,
    Toggle,
    Alloc,
    Free,
}

impl Command {
    const ALL: [Command; 6] = [
        Command::Help,
        Command::Status,
        Command::Quit,
        Command::Toggle,
        Command::Alloc,
        Command::Free,
    ];

    fn label(self) -> char {
        match self {
            Command::Help => 'h',
            Command::Status => 's',
            Command::Quit => 'q',
            Command::Toggle => 't',
            Command::Alloc => 'm',
            Command::Free => 'f',
        }
    }

    fn from_label(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.label() == c)
    }

    fn takes_identifier(self) -> bool {
        matches!(self, Command::Alloc | Command::Free)
    }

    fn summary(self) -> &'static str {
        match self {
            Command::Help => "display this help.",
            Command::Status => "display the identifiers and their payloads.",
            Command::Quit => "quit the simulation.",
            Command::Toggle => "switch between best-fit and first-fit.",
            Command::Alloc => {
                "followed by a positive integer n, bind x to a new\n        payload of n bytes."
            }
            Command::Free => "free the payload bound to x.",
        }
    }
}

/// Byte source with one byte of pushback.
struct Input<R> {
    bytes: Bytes<R>,
    pending: Option<u8>,
}

impl<R: Read> Input<R> {
    fn new(reader: R) -> Self {
        Self {
            bytes: reader.bytes(),
            pending: None,
        }
    }

    fn next(&mut self) -> io::Result<Option<u8>> {
        if let Some(b) = self.pending.take() {
            return Ok(Some(b));
        }
        self.bytes.next().transpose()
    }

    fn unread(&mut self, b: u8) {
        self.pending = Some(b);
    }

    /// Next byte that is not whitespace.
    fn next_token(&mut self) -> io::Result<Option<u8>> {
        while let Some(b) = self.next()? {
            if !b.is_ascii_whitespace() {
                return Ok(Some(b));
            }
        }
        Ok(None)
    }

    /// Drop everything up to the end of the line, keeping the newline so
    /// the next prompt is printed.
    fn forget_line(&mut self) -> io::Result<()> {
        while let Some(b) = self.next()? {
            if b == b'\n' {
                self.unread(b);
                break;
            }
        }
        Ok(())
    }

    /// Read a decimal number after optional whitespace.
    ///
    /// On failure returns the offending byte, left unread (`None` at end of
    /// input).
    fn number(&mut self) -> io::Result<Result<usize, Option<u8>>> {
        let Some(first) = self.next_token()? else {
            return Ok(Err(None));
        };
        if !first.is_ascii_digit() {
            self.unread(first);
            return Ok(Err(Some(first)));
        }
        let mut n = usize::from(first - b'0');
        while let Some(b) = self.next()? {
            if !b.is_ascii_digit() {
                self.unread(b);
                break;
            }
            n = match n.checked_mul(10).and_then(|n| n.checked_add(usize::from(b - b'0'))) {
                Some(n) => n,
                None => {
                    self.unread(b);
                    return Ok(Err(Some(b)));
                }
            };
        }
        Ok(Ok(n))
    }
}

/// Outcome of one command.
enum Flow {
    Continue,
    Quit,
    EndOfInput,
}

/// A heap, its identifier table and the streams of one interactive run.
pub struct Session<W, E> {
    heap: Heap,
    ids: Identifiers,
    out: W,
    err: E,
    palette: Palette,
}

impl<W: Write, E: Write> Session<W, E> {
    pub fn new(heap: Heap, out: W, err: E, palette: Palette) -> Self {
        Self {
            heap,
            ids: Identifiers::new(),
            out,
            err,
            palette,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Release the heap and hand back the output streams.
    pub fn finish(self) -> (W, E) {
        self.heap.dispose();
        (self.out, self.err)
    }

    /// Print the help text and the initial arena.
    pub fn start(&mut self) -> io::Result<()> {
        self.help()?;
        self.render()
    }

    /// Process commands from `reader` until `q` or end of input.
    pub fn run<R: Read>(&mut self, reader: R) -> io::Result<Exit> {
        let mut input = Input::new(reader);
        let mut c = Some(b'\n');
        while let Some(b) = c {
            if b.is_ascii_whitespace() {
                if b == b'\n' {
                    write!(self.out, "{PROMPT}")?;
                    self.out.flush()?;
                }
            } else {
                match self.dispatch(b, &mut input)? {
                    Flow::Continue => {}
                    Flow::Quit => return Ok(Exit::Quit),
                    Flow::EndOfInput => break,
                }
            }
            c = input.next()?;
        }
        writeln!(self.out)?;
        Ok(Exit::EndOfInput)
    }

    fn dispatch<R: Read>(&mut self, b: u8, input: &mut Input<R>) -> io::Result<Flow> {
        let Some(cmd) = Command::from_label(char::from(b)) else {
            self.complain("Unknown command", b, input)?;
            return Ok(Flow::Continue);
        };
        match cmd {
            Command::Help => self.help()?,
            Command::Status => self.status()?,
            Command::Toggle => self.toggle()?,
            Command::Quit => {
                writeln!(self.out, "\nEnd of simulation.")?;
                return Ok(Flow::Quit);
            }
            Command::Alloc | Command::Free => {
                let Some(id) = input.next_token()? else {
                    return Ok(Flow::EndOfInput);
                };
                if !self.ids.is_valid(char::from(id)) {
                    self.complain("Invalid identifier", id, input)?;
                } else if cmd == Command::Alloc {
                    self.alloc(char::from(id), input)?;
                } else {
                    self.free(char::from(id))?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn complain<R: Read>(&mut self, msg: &str, b: u8, input: &mut Input<R>) -> io::Result<()> {
        writeln!(self.err, "*** {msg}: '{}'", char::from(b))?;
        input.forget_line()
    }

    fn help(&mut self) -> io::Result<()> {
        writeln!(self.out, "Identifiers are made of a single uppercase character")?;
        writeln!(self.out, "In the following list of commands, x means any identifier.")?;
        writeln!(self.out, "\nCommands:")?;
        for cmd in Command::ALL {
            let param = if cmd.takes_identifier() { "x " } else { "  " };
            writeln!(self.out, "{:>3} {param}  {}", cmd.label(), cmd.summary())?;
        }
        writeln!(self.out)
    }

    fn status(&mut self) -> io::Result<()> {
        writeln!(self.out, "\nIdentifiers:")?;
        for (id, payload) in self.ids.iter() {
            match payload {
                Some(p) => writeln!(self.out, "{id:>3}     {p}")?,
                None => writeln!(self.out, "{id:>3}     -")?,
            }
        }
        writeln!(self.out)
    }

    fn toggle(&mut self) -> io::Result<()> {
        let strategy = self.heap.toggle_strategy();
        writeln!(self.out, "HEAP    : switch to {strategy}")
    }

    fn alloc<R: Read>(&mut self, id: char, input: &mut Input<R>) -> io::Result<()> {
        if self.ids.get(id).is_some() {
            return self.complain("identifier is already allocated", id as u8, input);
        }
        let size = match input.number()? {
            Ok(n) => n,
            Err(Some(b)) => return self.complain("Invalid size", b, input),
            Err(None) => return Ok(()),
        };

        match self.heap.allocate(size) {
            Ok(p) => {
                self.heap.payload_mut(p)[0] = id as u8;
                if let Err(BindError::Occupied) = self.ids.bind(id, p) {
                    self.heap.deallocate(p);
                    return self.complain("identifier is already allocated", id as u8, input);
                }
            }
            Err(e) => {
                info!("m {id} {size}: {e}");
                writeln!(self.out, "M_ALLOC : FAILURE")?;
            }
        }
        self.render()
    }

    fn free(&mut self, id: char) -> io::Result<()> {
        self.heap.deallocate(self.ids.take(id));
        self.render()
    }

    fn render(&mut self) -> io::Result<()> {
        render(&self.heap, self.palette, &mut self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas::arena::{HeapConfig, MIN_BLOCK_SIZE};

    struct Run {
        exit: Exit,
        out: String,
        err: String,
        heap: Heap,
    }

    fn run_with(size: usize, script: &str) -> Run {
        let heap = Heap::reserve(HeapConfig::new(size)).unwrap();
        let mut session = Session::new(heap, Vec::new(), Vec::new(), Palette::PLAIN);
        let exit = session.run(script.as_bytes()).unwrap();
        let Session { heap, out, err, .. } = session;
        Run {
            exit,
            out: String::from_utf8(out).unwrap(),
            err: String::from_utf8(err).unwrap(),
            heap,
        }
    }

    fn run(script: &str) -> Run {
        run_with(80, script)
    }

    #[test]
    fn quit_ends_with_success() {
        let r = run("q\n");
        assert_eq!(r.exit, Exit::Quit);
        assert!(r.out.starts_with(PROMPT));
        assert!(r.out.contains("End of simulation."));
    }

    #[test]
    fn end_of_input_without_quit() {
        let r = run("t\n");
        assert_eq!(r.exit, Exit::EndOfInput);
        assert!(r.out.contains("switch to first-fit"));
    }

    #[test]
    fn alloc_stores_identifier_byte() {
        let r = run("m A 10\nq\n");
        let p = r.heap.layout()[1].payload().unwrap();
        assert_eq!(r.heap.payload(p)[0], b'A');
        assert!(r.out.contains("-A-"), "{}", r.out);
    }

    #[test]
    fn several_commands_on_one_line() {
        let r = run("m A 8 m B 8 f A\n");
        let used: Vec<_> = r.heap.blocks().filter(|b| !b.is_free()).collect();
        assert_eq!(used.len(), 1);
        let p = used[0].payload().unwrap();
        assert_eq!(r.heap.payload(p)[0], b'B');
    }

    #[test]
    fn unknown_command_discards_line() {
        let r = run("x m A 8\nt\n");
        assert_eq!(r.err, "*** Unknown command: 'x'\n");
        assert_eq!(r.heap.blocks().count(), 1);
        assert!(r.out.contains("switch to first-fit"));
    }

    #[test]
    fn invalid_identifier_is_reported() {
        let r = run("m a 8\nm Z 8\n");
        assert_eq!(
            r.err,
            "*** Invalid identifier: 'a'\n*** Invalid identifier: 'Z'\n"
        );
    }

    #[test]
    fn identifier_in_use_is_rejected() {
        let r = run("m A 8\nm A 8\n");
        assert_eq!(r.err, "*** identifier is already allocated: 'A'\n");
        assert_eq!(r.heap.blocks().filter(|b| !b.is_free()).count(), 1);
    }

    #[test]
    fn non_numeric_size_is_rejected() {
        let r = run("m A x\n");
        assert_eq!(r.err, "*** Invalid size: 'x'\n");
        assert_eq!(r.heap.blocks().count(), 1);
    }

    #[test]
    fn failed_allocation_is_announced() {
        let r = run("m A 40 m B 40\n");
        assert!(r.out.contains("M_ALLOC : FAILURE"));
        assert_eq!(r.heap.stats().failed_allocations, 1);
    }

    #[test]
    fn failed_allocation_leaves_identifier_free() {
        let r = run_with(3 * MIN_BLOCK_SIZE, "m A 1000 m A 0\n");
        assert!(r.out.contains("M_ALLOC : FAILURE"));
        assert!(r.err.is_empty(), "{}", r.err);
        assert_eq!(r.heap.blocks().filter(|b| !b.is_free()).count(), 1);
    }

    #[test]
    fn free_of_unbound_identifier_is_a_no_op() {
        let r = run("f C\n");
        assert!(r.err.is_empty());
        assert_eq!(r.heap.stats().frees, 0);
    }

    #[test]
    fn status_lists_bindings() {
        let r = run("m B 8 s\n");
        assert!(r.out.contains("\nIdentifiers:\n"));
        assert!(r.out.contains("  A     -\n"));
        assert!(r.out.contains("  B     #0072\n"), "{}", r.out);
    }

    #[test]
    fn help_lists_every_command() {
        let r = run("h\n");
        for label in ['h', 's', 'q', 't', 'm', 'f'] {
            assert!(r.out.contains(&format!("  {label} ")), "{label}");
        }
    }

    #[test]
    fn every_newline_prompts() {
        let r = run("\n\n");
        assert_eq!(r.out.matches(PROMPT).count(), 3);
    }
}
