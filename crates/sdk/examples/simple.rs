//! Simple SDK Example
//!
//! Demonstrates the three execution operations.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package systemcalls --example simple
//! ```

use systemcalls::{direct_exec, redirect_exec, shell_available, shell_exec, try_direct_exec};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("systemcalls - Simple Example");
    println!("============================\n");

    // 1. Shell execution
    println!("1. Shell available: {}", shell_available());
    println!("   shell_exec(\"true\")   = {}", shell_exec("true"));
    println!("   shell_exec(\"exit 7\") = {}\n", shell_exec("exit 7"));

    // 2. Direct execution
    println!("2. Direct execution...");
    println!(
        "   direct_exec(\"/bin/echo\", [\"hi\"]) = {}",
        direct_exec("/bin/echo", &["hi"])
    );
    if let Err(e) = try_direct_exec("/no/such/binary", &["x"]) {
        println!("   ✓ Missing binary reported: {e}\n");
    }

    // 3. Redirected execution
    println!("3. Redirected execution...");
    let output = std::env::temp_dir().join("systemcalls-simple.txt");
    let ok = redirect_exec("/bin/echo", &["hello"], &output);
    println!("   redirect_exec -> {ok}");
    println!("   {} contains {:?}", output.display(), std::fs::read_to_string(&output)?);

    Ok(())
}
