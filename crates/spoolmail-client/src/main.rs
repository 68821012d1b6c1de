//! Spoolmail - interactive terminal client
//!
//! Menu-driven client for the relay's line protocol. Thin I/O only; all
//! protocol rules live on the server side.

use anyhow::{bail, Context, Result};
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

type Prompt = Lines<BufReader<Stdin>>;

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("Failed to connect to {}:{}", host, port))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    async fn send(&mut self, data: &str) -> Result<()> {
        self.writer.write_all(data.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn recv_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            bail!("Server closed the connection");
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

/// Print a label and read one line from the terminal.
async fn ask(prompt: &mut Prompt, label: &str) -> Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    prompt
        .next_line()
        .await?
        .context("Standard input closed")
}

fn menu(logged_in: bool) {
    println!();
    println!("Spoolmail client");
    println!("1) LOGIN");
    println!("2) SEND");
    println!("3) LIST");
    println!("4) READ");
    println!("5) DEL");
    println!("6) QUIT");
    println!("{}", if logged_in { "(logged in)" } else { "(not logged in)" });
}

async fn do_login(conn: &mut Connection, prompt: &mut Prompt) -> Result<bool> {
    let username = ask(prompt, "Username: ").await?;
    let password = ask(prompt, "Password: ").await?;

    conn.send(&format!("LOGIN\n{}\n{}\n", username, password))
        .await?;

    let reply = conn.recv_line().await?;
    if reply == "OK" {
        println!("Login successful.");
        Ok(true)
    } else {
        println!("Login failed.");
        Ok(false)
    }
}

async fn do_send(conn: &mut Connection, prompt: &mut Prompt) -> Result<()> {
    let receiver = ask(prompt, "Receiver (max 8 chars, a-z 0-9): ").await?;
    let subject = ask(prompt, "Subject (max 80 chars): ").await?;

    println!("Message body (end with a single '.' on its own line):");
    let mut body = String::new();
    loop {
        let line = prompt.next_line().await?.context("Standard input closed")?;
        if line == "." {
            break;
        }
        body.push_str(&line);
        body.push('\n');
    }

    conn.send(&format!("SEND\n{}\n{}\n{}.\n", receiver, subject, body))
        .await?;

    println!("Server: {}", conn.recv_line().await?);
    Ok(())
}

async fn do_list(conn: &mut Connection) -> Result<()> {
    conn.send("LIST\n").await?;

    let count_line = conn.recv_line().await?;
    if count_line == "ERR" {
        println!("Server: ERR");
        return Ok(());
    }

    let count: usize = count_line
        .parse()
        .with_context(|| format!("Unexpected LIST reply: {}", count_line))?;
    println!("Messages: {}", count);

    for index in 1..=count {
        println!("{}) {}", index, conn.recv_line().await?);
    }
    Ok(())
}

async fn do_read(conn: &mut Connection, prompt: &mut Prompt) -> Result<()> {
    let number = ask(prompt, "Message number: ").await?;
    conn.send(&format!("READ\n{}\n", number)).await?;

    let reply = conn.recv_line().await?;
    if reply != "OK" {
        println!("Server: {}", reply);
        return Ok(());
    }

    println!("Sender:   {}", conn.recv_line().await?);
    println!("Receiver: {}", conn.recv_line().await?);
    println!("Subject:  {}", conn.recv_line().await?);
    println!("Body:");
    loop {
        let line = conn.recv_line().await?;
        if line == "." {
            break;
        }
        println!("{}", line);
    }
    Ok(())
}

async fn do_del(conn: &mut Connection, prompt: &mut Prompt) -> Result<()> {
    let number = ask(prompt, "Message number: ").await?;
    conn.send(&format!("DEL\n{}\n", number)).await?;
    println!("Server: {}", conn.recv_line().await?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(host), Some(port)) = (args.next(), args.next()) else {
        bail!("Usage: spoolmail <host> <port>");
    };
    let port: u16 = port.parse().context("Invalid port argument")?;

    let mut conn = Connection::connect(&host, port).await?;
    println!("Connected to {}:{}", host, port);

    let mut prompt = BufReader::new(tokio::io::stdin()).lines();
    let mut logged_in = false;

    loop {
        menu(logged_in);
        let choice = ask(&mut prompt, "Choice: ").await?;

        match choice.trim() {
            "1" => logged_in = do_login(&mut conn, &mut prompt).await?,
            "2" => do_send(&mut conn, &mut prompt).await?,
            "3" => do_list(&mut conn).await?,
            "4" => do_read(&mut conn, &mut prompt).await?,
            "5" => do_del(&mut conn, &mut prompt).await?,
            "6" => {
                conn.send("QUIT\n").await?;
                break;
            }
            "" => continue,
            other => println!("Unknown choice: {}", other),
        }
    }

    Ok(())
}
