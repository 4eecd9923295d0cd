//! Contact Cascade Example
//!
//! Demonstrates:
//! - Defining records and their marshallers
//! - Wiring a parent storage to a child storage through a deleter
//! - Watching change events, including cascaded removals
//!
//! Run with: cargo run --example contact_cascade

use std::sync::Arc;

use burrow::prelude::*;
use burrow::{ByteReader, ByteWriter};

#[derive(Clone, PartialEq, Debug)]
struct Contact {
    id: String,
    name: String,
}

#[derive(Clone, PartialEq, Debug)]
struct Message {
    id: String,
    contact_id: String,
    text: String,
}

impl Record for Contact {
    type Key = String;
    fn id(&self) -> String {
        self.id.clone()
    }
}

impl Record for Message {
    type Key = String;
    fn id(&self) -> String {
        self.id.clone()
    }
}

struct ContactMarshaller;

impl Marshal<Contact> for ContactMarshaller {
    fn byte_size(e: &Contact) -> u32 {
        ByteWriter::str_size(&e.id) + ByteWriter::str_size(&e.name)
    }
    fn store(e: &Contact, dest: &mut [u8]) {
        let mut w = ByteWriter::new(dest);
        w.put_str(&e.id);
        w.put_str(&e.name);
    }
    fn restore(src: &[u8]) -> Contact {
        let mut r = ByteReader::new(src);
        Contact {
            id: r.take_str(),
            name: r.take_str(),
        }
    }
}

struct MessageMarshaller;

impl Marshal<Message> for MessageMarshaller {
    fn byte_size(e: &Message) -> u32 {
        ByteWriter::str_size(&e.id)
            + ByteWriter::str_size(&e.contact_id)
            + ByteWriter::str_size(&e.text)
    }
    fn store(e: &Message, dest: &mut [u8]) {
        let mut w = ByteWriter::new(dest);
        w.put_str(&e.id);
        w.put_str(&e.contact_id);
        w.put_str(&e.text);
    }
    fn restore(src: &[u8]) -> Message {
        let mut r = ByteReader::new(src);
        Message {
            id: r.take_str(),
            contact_id: r.take_str(),
            text: r.take_str(),
        }
    }
}

// Secondary key of a message is the id of the contact it belongs to.
fn message_contact_id(record: &[u8]) -> Result<Vec<u8>> {
    Ok(MessageMarshaller::restore(record).contact_id.into_bytes())
}

fn main() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let env = StoreEnv::open(EnvConfig::new(dir.path()).with_map_size(64 * 1024 * 1024))?;

    let contacts_db = env.create_database("contacts")?;
    let messages_db = env.create_database("messages")?;
    let messages_by_contact = env.create_multimap_database("messages_by_contact")?;

    let message_watcher = Arc::new(ChangeWatcher::new());
    message_watcher.append_permanent(EventMask::ALL, |kind, m: &Message| {
        println!("message event {kind:?}: {} ({})", m.id, m.text);
    });

    let messages = Arc::new(
        ChildStorage::<Message, Contact>::open::<MessageMarshaller>(
            env.clone(),
            messages_db,
            messages_by_contact,
            message_contact_id,
            Deleter::leaf(),
        )?
        .with_watcher(message_watcher.clone()),
    );

    let contact_watcher = Arc::new(ChangeWatcher::new());
    contact_watcher.append_permanent(EventMask::ALL, |kind, c: &Contact| {
        println!("contact event {kind:?}: {} ({})", c.id, c.name);
    });

    let contacts = Arc::new(
        Storage::open::<ContactMarshaller>(
            env.clone(),
            contacts_db,
            Deleter::parent(messages.clone()),
        )?
        .with_watcher(contact_watcher.clone()),
    );

    contacts.add(&Contact {
        id: "alice".into(),
        name: "Alice".into(),
    })?;
    contacts.add(&Contact {
        id: "bob".into(),
        name: "Bob".into(),
    })?;

    for (id, contact_id, text) in [
        ("m1", "alice", "hello"),
        ("m2", "alice", "are you there?"),
        ("m3", "bob", "lunch?"),
    ] {
        messages.add(&Message {
            id: id.into(),
            contact_id: contact_id.into(),
            text: text.into(),
        })?;
    }

    println!("messages before: {}", messages.size()?);

    // Removing Alice also removes both of her messages, in one transaction.
    contacts.remove(&"alice".to_string())?;

    println!("messages after: {}", messages.size()?);
    for m in messages.all()? {
        println!("remaining: {} -> {}", m.contact_id, m.text);
    }

    // let the watcher threads drain before the program exits
    std::thread::sleep(std::time::Duration::from_millis(50));
    Ok(())
}
