/// Display version information
pub fn execute() {
    println!("bountyd {}", env!("CARGO_PKG_VERSION"));
    println!("DAO bounty lifecycle engine");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_execute() {
        // Version command should not panic
        execute();
    }
}
