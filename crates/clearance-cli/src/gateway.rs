//! # Gateway CLI — Callback signature tooling.
//!
//! Computes or checks the HMAC-SHA256 signature the payment gateway sends
//! with a completed checkout. Useful for replaying callbacks against a
//! sandbox deployment.
//!
//! The secret is read from an environment variable so it stays out of
//! shell history.
//!
//! ```bash
//! GATEWAY_SECRET=... clearance gateway sign --order-id order_1 --payment-id pay_1
//! GATEWAY_SECRET=... clearance gateway verify --order-id order_1 --payment-id pay_1 --signature 5f...
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use clearance_ports::{sign_with_secret, HmacPaymentGateway, PaymentGateway};

/// Gateway subcommand arguments.
#[derive(Args, Debug)]
pub struct GatewayArgs {
    /// Environment variable holding the gateway secret.
    #[arg(long, global = true, default_value = "GATEWAY_SECRET")]
    pub secret_env: String,

    #[command(subcommand)]
    pub command: GatewayCommand,
}

/// Available gateway subcommands.
#[derive(Subcommand, Debug)]
pub enum GatewayCommand {
    /// Print the callback signature for an order and payment.
    Sign {
        #[arg(long)]
        order_id: String,
        #[arg(long)]
        payment_id: String,
    },

    /// Check a callback signature. Exits 1 when it does not verify.
    Verify {
        #[arg(long)]
        order_id: String,
        #[arg(long)]
        payment_id: String,
        #[arg(long)]
        signature: String,
    },
}

/// Execute the gateway subcommand.
pub fn run_gateway(args: &GatewayArgs) -> Result<u8> {
    let secret = std::env::var(&args.secret_env)
        .with_context(|| format!("${} is not set", args.secret_env))?;
    match &args.command {
        GatewayCommand::Sign {
            order_id,
            payment_id,
        } => {
            println!("{}", sign_with_secret(secret.as_bytes(), order_id, payment_id)?);
            Ok(0)
        }
        GatewayCommand::Verify {
            order_id,
            payment_id,
            signature,
        } => {
            if verify_signature(secret.as_bytes(), order_id, payment_id, signature)? {
                println!("  signature OK");
                Ok(0)
            } else {
                println!("  signature MISMATCH");
                Ok(1)
            }
        }
    }
}

/// Whether `signature` is what the gateway holding `secret` would send.
pub fn verify_signature(
    secret: &[u8],
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<bool> {
    let gateway = HmacPaymentGateway::new("cli", secret.to_vec())?;
    Ok(gateway.verify(order_id, payment_id, signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_callback_verifies() {
        let sig = sign_with_secret(b"merchant", "order_9", "pay_9").unwrap();
        assert!(verify_signature(b"merchant", "order_9", "pay_9", &sig).unwrap());
        assert!(!verify_signature(b"merchant", "order_9", "pay_8", &sig).unwrap());
        assert!(!verify_signature(b"other", "order_9", "pay_9", &sig).unwrap());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(verify_signature(b"", "order_9", "pay_9", "00").is_err());
    }
}
