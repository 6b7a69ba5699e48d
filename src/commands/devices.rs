//! Device inspection commands.

use alien_hid::{
    CapabilityQuery, DataItem, DeviceSession, OpenOptions, ReportKind, SessionError,
};
use alien_macros::{find_known, Config};
use anyhow::Result;

use super::{open_backend, setup_interrupt_handler, target_path};

/// List all HID interfaces
pub fn list() -> Result<()> {
    let backend = open_backend()?;
    let candidates = backend.enumerate()?;

    println!("HID interfaces ({} found, * = known macro-key device):", candidates.len());
    for c in &candidates {
        let known = find_known(&c.identity);
        println!(
            "  {} VID={:04x} PID={:04x} page={:04x} usage={:04x} if={} {} [{}]",
            if known.is_some() { '*' } else { ' ' },
            c.identity.vendor_id,
            c.identity.product_id,
            c.identity.usage_page,
            c.identity.usage,
            c.interface_number,
            known.map_or(c.display_name(), |d| d.display_name),
            c.path,
        );
    }
    Ok(())
}

/// Print report shapes, capabilities and the data-item layout
pub fn caps(config: &Config, path: Option<&str>) -> Result<()> {
    let backend = open_backend()?;
    let path = target_path(&backend, config, path)?;

    let mut session = DeviceSession::new(backend);
    session.open(&path, OpenOptions::default())?;

    if let Some(identity) = session.identity() {
        println!("Device:       {identity}");
    }
    println!(
        "Product:      {} {}",
        session.manufacturer().unwrap_or("Unknown"),
        session.product().unwrap_or("")
    );
    let Some(preparsed) = session.preparsed() else {
        return Ok(());
    };
    let top = preparsed.top_level();
    println!(
        "Collection:   page 0x{:04X} usage 0x{:04X}{}",
        top.usage_page,
        top.usage,
        if preparsed.numbered_reports() {
            ", numbered reports"
        } else {
            ""
        }
    );

    for kind in ReportKind::ALL {
        let shape = preparsed.shape(kind);
        if shape.is_empty() {
            continue;
        }
        println!(
            "\n{kind} reports: {} bytes, {} button caps, {} value caps",
            shape.byte_length, shape.button_caps, shape.value_caps
        );

        for cap in preparsed.button_caps(kind)? {
            println!(
                "  button  report {:>3}  page 0x{:04X}  usages 0x{:04X}..=0x{:04X}",
                cap.report_id, cap.usage_page, cap.usage_min, cap.usage_max
            );
        }
        for cap in preparsed.value_caps(kind)? {
            println!(
                "  value   report {:>3}  page 0x{:04X}  usages 0x{:04X}..=0x{:04X}  {}x{} bits  logical {}..={}  physical {}..={}{}",
                cap.report_id,
                cap.usage_page,
                cap.usage_min,
                cap.usage_max,
                cap.report_count,
                cap.bit_size,
                cap.logical_min,
                cap.logical_max,
                cap.physical_min,
                cap.physical_max,
                if cap.has_null { "  null" } else { "" }
            );
        }

        if let Some(layout) = session.layout(kind) {
            println!("  layout:");
            for (i, item) in layout.items().iter().enumerate() {
                println!("    [{i}] {}", describe_item(item));
            }
        }
    }

    session.close();
    Ok(())
}

/// Print the active usages of incoming reports
pub fn probe(config: &Config, path: Option<&str>, count: Option<u64>) -> Result<()> {
    let backend = open_backend()?;
    let path = target_path(&backend, config, path)?;

    let mut session = DeviceSession::new(backend).with_wait_timeout(config.monitor.read_timeout());
    session.open(&path, OpenOptions::monitor())?;

    let cancel = setup_interrupt_handler()?;
    println!("Probing {path}. Press keys, Ctrl-C to stop.");

    let mut seen = 0u64;
    let result = session.read_async_with(count, &cancel, |items| {
        seen += 1;
        let active: Vec<String> = items
            .iter()
            .filter_map(DataItem::as_button)
            .flat_map(|b| b.pressed())
            .map(|u| format!("0x{u:04X}"))
            .collect();
        if active.is_empty() {
            println!("report {seen:>5}: (released)");
        } else {
            println!("report {seen:>5}: {}", active.join(" "));
        }
    });
    session.close();

    match result {
        Ok(_) => Ok(()),
        Err(SessionError::Cancelled) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn describe_item(item: &DataItem) -> String {
    match item {
        DataItem::Button(b) => format!(
            "button report {} page 0x{:04X} usages 0x{:04X}..=0x{:04X} ({} slots)",
            b.report_id, b.usage_page, b.usage_min, b.usage_max, b.max_usage_count
        ),
        DataItem::Value(v) => format!(
            "value  report {} page 0x{:04X} usage 0x{:04X}",
            v.report_id, v.usage_page, v.usage
        ),
    }
}
