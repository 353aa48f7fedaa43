/// Serial port (COM1, 0x3F8) diagnostics for the protected-mode stage.
///
/// Output only. Compiled in with the `debug-print` feature; otherwise
/// `boot_println!` still type-checks its arguments but emits nothing.
/// Host-target tests never touch the port.
use core::fmt;
use spin::Mutex;

const COM1: u16 = 0x3F8;

// UART register offsets used here.
const THR: u16 = 0; // transmit holding; divisor low while DLAB is set
const IER: u16 = 1; // interrupt enable; divisor high while DLAB is set
const FCR: u16 = 2;
const LCR: u16 = 3;
const LSR: u16 = 5;

const LSR_THR_EMPTY: u8 = 0x20;

/// Register writes that leave the port polled-only at 115200 8N1.
const SETUP: [(u16, u8); 6] = [
    (IER, 0x00),
    (LCR, 0x80), // DLAB on
    (THR, 0x01), // divisor 1
    (IER, 0x00),
    (LCR, 0x03), // DLAB off, 8N1
    (FCR, 0xC7),
];

pub static SERIAL: Mutex<Serial> = Mutex::new(Serial::new(COM1));

/// Polled transmitter. Counts what it hands to the UART.
pub struct Serial {
    port: u16,
    sent: u64,
}

impl Serial {
    pub const fn new(port: u16) -> Self {
        Self { port, sent: 0 }
    }

    pub fn init(&self) {
        for (reg, val) in SETUP {
            outb(self.port + reg, val);
        }
    }

    /// Bytes pushed to the transmit register so far, CRs included.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    fn put(&mut self, byte: u8) {
        while inb(self.port + LSR) & LSR_THR_EMPTY == 0 {
            core::hint::spin_loop();
        }
        outb(self.port + THR, byte);
        self.sent += 1;
    }
}

/// Terminals on the other end of `-serial stdio` want CRLF.
impl fmt::Write for Serial {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.put(b'\r');
            }
            self.put(byte);
        }
        Ok(())
    }
}

#[cfg(all(feature = "debug-print", not(test), any(target_arch = "x86", target_arch = "x86_64")))]
mod port {
    #[inline(always)]
    pub fn outb(port: u16, val: u8) {
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") val,
                options(nostack, preserves_flags),
            );
        }
    }

    #[inline(always)]
    pub fn inb(port: u16) -> u8 {
        let val: u8;
        unsafe {
            core::arch::asm!(
                "in al, dx",
                in("dx") port,
                out("al") val,
                options(nostack, preserves_flags),
            );
        }
        val
    }
}

// Diagnostics off: the port is never driven. Reporting "transmit empty"
// keeps `put` from spinning if it is reached anyway.
#[cfg(not(all(feature = "debug-print", not(test), any(target_arch = "x86", target_arch = "x86_64"))))]
mod port {
    #[inline(always)]
    pub fn outb(_port: u16, _val: u8) {}

    #[inline(always)]
    pub fn inb(_port: u16) -> u8 {
        0x20
    }
}

use port::{inb, outb};

/// Bring up COM1 if diagnostics are compiled in.
pub fn init() {
    if crate::config::DEBUG_PRINT {
        SERIAL.lock().init();
    }
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    if crate::config::DEBUG_PRINT && !cfg!(test) {
        use fmt::Write;
        let _ = SERIAL.lock().write_fmt(args);
    }
}

/// Print to the serial console.
#[macro_export]
macro_rules! boot_print {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!($($arg)*))
    };
}

/// Print to the serial console with a newline.
#[macro_export]
macro_rules! boot_println {
    () => ($crate::boot_print!("\n"));
    ($($arg:tt)*) => {
        $crate::boot_print!("{}\n", format_args!($($arg)*))
    };
}
