mod menu;
mod payload;

use std::net::{SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, LevelFilter};
use rdt_session::{
    CorruptionConfig, Delivery, KeepAliveHandle, Payload, PostDelivery, Receiver, ReceiverConfig,
    Sender, SenderConfig, TransferOptions,
};
use rustyline::DefaultEditor;
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};

use menu::{prompt_addr, prompt_choice, prompt_fragment_size, prompt_line, prompt_port};
use payload::{load_file, save_file};

enum ClientNext {
    Quit,
    SwitchToServer,
}

enum ServerNext {
    Quit,
    SwitchToClient,
}

fn main() -> Result<()> {
    TermLogger::init(
        LevelFilter::Info,
        LogConfig::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("failed to initialize logger")?;

    let mut editor = DefaultEditor::new().context("failed to start line editor")?;
    let mut mode = None;

    loop {
        let choice = match mode.take() {
            Some(m) => m,
            None => prompt_choice(&mut editor, "What would you like to do?", &["Client", "Server", "Quit"])?,
        };

        match choice {
            0 => match run_client(&mut editor) {
                Ok(ClientNext::SwitchToServer) => mode = Some(1),
                Ok(ClientNext::Quit) => break,
                Err(err) => {
                    error!("client session ended with an error: {err:#}");
                    break;
                }
            },
            1 => match run_server(&mut editor) {
                Ok(ServerNext::SwitchToClient) => mode = Some(0),
                Ok(ServerNext::Quit) => break,
                Err(err) => {
                    error!("server session ended with an error: {err:#}");
                    break;
                }
            },
            _ => break,
        }
    }

    println!("goodbye");
    Ok(())
}

fn run_client(editor: &mut DefaultEditor) -> Result<ClientNext> {
    let mut dest: SocketAddr = prompt_addr(editor, "Server address (e.g. 127.0.0.1:9000)")?;
    let mut keepalive: Option<KeepAliveHandle> = None;
    // `sender` stays bound to the socket that performed the last handshake,
    // so "send to the same server" can hand the still-alive connection a
    // follow-up transfer without re-handshaking (§4.3's continuing-transfer
    // path expects a bare METADATA fragment from the same peer, not a new
    // INIT from a fresh ephemeral port).
    let mut sender: Option<Sender> = None;

    loop {
        let transfer_payload = prompt_payload(editor)?;
        let options = TransferOptions {
            fragment_size: prompt_fragment_size(editor)?,
            corruption: prompt_corruption(editor)?,
        };

        let result = match &sender {
            Some(existing) => {
                info!("continuing transfer to {dest}");
                existing.continue_transfer(transfer_payload, options)
            }
            None => {
                let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").context("binding client socket")?);
                let fresh = Sender::new(socket, dest, SenderConfig::default());
                info!("sending to {dest}");
                let result = fresh.send(transfer_payload, options);
                sender = Some(fresh);
                result
            }
        };

        match result {
            Ok(handle) => {
                println!("transfer complete, keep-alive running");
                if let Some(previous) = keepalive.replace(handle) {
                    previous.cancel();
                }
            }
            Err(err) => error!("transfer failed: {err:#}"),
        }

        let choice = prompt_choice(
            editor,
            "What next?",
            &[
                "Send data to the same server",
                "Send data to a different server",
                "Switch to server mode",
                "Quit",
            ],
        )?;
        match choice {
            0 => continue,
            1 => {
                dest = prompt_addr(editor, "Server address (e.g. 127.0.0.1:9000)")?;
                sender = None;
                continue;
            }
            2 => {
                if let Some(handle) = keepalive.take() {
                    handle.cancel();
                }
                return Ok(ClientNext::SwitchToServer);
            }
            _ => {
                if let Some(handle) = keepalive.take() {
                    handle.cancel();
                }
                return Ok(ClientNext::Quit);
            }
        }
    }
}

fn run_server(editor: &mut DefaultEditor) -> Result<ServerNext> {
    let port = prompt_port(editor, "Port to listen on")?;
    let socket = Arc::new(UdpSocket::bind(("0.0.0.0", port)).context("binding server socket")?);

    loop {
        let receiver = Receiver::new(Arc::clone(&socket), ReceiverConfig::default());
        info!("awaiting a handshake on port {port}");
        let peer = receiver.await_handshake()?;

        let mut seed = None;
        loop {
            let delivery = receiver.receive_transfer(peer, seed.take())?;
            report_delivery(&delivery)?;
            match receiver.await_post_delivery(peer)? {
                PostDelivery::Idle => break,
                PostDelivery::ContinuingTransfer(metadata) => {
                    seed = Some(metadata);
                }
            }
        }

        let choice = prompt_choice(
            editor,
            "What next?",
            &["Receive more data", "Switch to client mode", "Quit"],
        )?;
        match choice {
            0 => continue,
            1 => return Ok(ServerNext::SwitchToClient),
            _ => return Ok(ServerNext::Quit),
        }
    }
}

fn prompt_payload(editor: &mut DefaultEditor) -> Result<Payload> {
    let choice = prompt_choice(editor, "Send a message or a file?", &["Message", "File"])?;
    if choice == 0 {
        let text = prompt_line(editor, "Message")?;
        Ok(Payload::Message(text.into_bytes()))
    } else {
        let path: PathBuf = prompt_line(editor, "Path to file")?.into();
        let (name, bytes) = load_file(&path)?;
        Ok(Payload::File { name, bytes })
    }
}

/// Offers the fault-injection hooks from §9 as an explicit opt-in, rather
/// than the always-on global toggles the original tool exposed.
fn prompt_corruption(editor: &mut DefaultEditor) -> Result<CorruptionConfig> {
    let choice = prompt_choice(
        editor,
        "Inject faults into this transfer?",
        &["None", "Corrupt some fragments", "Drop one fragment", "Both"],
    )?;
    Ok(match choice {
        1 => CorruptionConfig::new(true, false),
        2 => CorruptionConfig::new(false, true),
        3 => CorruptionConfig::new(true, true),
        _ => CorruptionConfig::default(),
    })
}

fn report_delivery(delivery: &Delivery) -> Result<()> {
    match delivery {
        Delivery::Message(text) => {
            println!("received message: {text}");
        }
        Delivery::File { name, bytes } => {
            let path = save_file(name, bytes)?;
            println!("received file, saved to {}", path.display());
        }
    }
    Ok(())
}
