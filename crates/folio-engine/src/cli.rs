use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

/// Interpret a yes/no answer; anything unrecognised is `None`.
pub fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" | "1" => Some(true),
        "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Line-oriented prompts used when no URL is given on the command line.
pub struct Prompter<R, W> {
    lines: Lines<R>,
    out: W,
}

impl Prompter<BufReader<tokio::io::Stdin>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), io::stdout())
    }
}

impl<R: AsyncBufRead + Unpin, W: Write> Prompter<R, W> {
    pub fn new(reader: R, out: W) -> Self {
        Self {
            lines: reader.lines(),
            out,
        }
    }

    /// Print `question` and read one trimmed line. `None` on end of input.
    pub async fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.out, "{}", question)?;
        self.out.flush()?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }

    /// Ask for a URL until a non-empty one is given.
    pub async fn url(&mut self) -> io::Result<Option<String>> {
        loop {
            match self.ask("Enter URL to scroll: ").await? {
                Some(url) if !url.is_empty() => return Ok(Some(url)),
                Some(_) => writeln!(self.out, "Please enter a valid URL.")?,
                None => return Ok(None),
            }
        }
    }

    /// Ask whether to download images until the answer is recognised.
    pub async fn download_images(&mut self) -> io::Result<Option<bool>> {
        loop {
            let Some(answer) = self.ask("Download images while scrolling? (y/n): ").await? else {
                return Ok(None);
            };
            match parse_yes_no(&answer) {
                Some(choice) => return Ok(Some(choice)),
                None => writeln!(self.out, "Please enter 'y' for yes or 'n' for no.")?,
            }
        }
    }

    /// Block until the user presses Enter (or input ends).
    pub async fn wait_for_enter(&mut self, message: &str) -> io::Result<()> {
        self.ask(message).await.map(|_| ())
    }

    pub fn into_output(self) -> W {
        self.out
    }
}
