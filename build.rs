//! Build script to embed Windows resource metadata into executables
//! This sets the application name shown in Task Manager

fn main() {
    #[cfg(windows)]
    {
        let target = std::env::var("CARGO_BIN_NAME").unwrap_or_default();

        let mut res = winresource::WindowsResource::new();

        res.set("ProductName", "Hourglass Overlay");
        res.set("CompanyName", "Hourglass Overlay");
        res.set("ProductVersion", env!("CARGO_PKG_VERSION"));
        res.set("FileVersion", env!("CARGO_PKG_VERSION"));

        match target.as_str() {
            "hourglass_overlay" => {
                res.set("FileDescription", "Hourglass");
                res.set("InternalName", "Hourglass");
                res.set("OriginalFilename", "hourglass_overlay.exe");
            }
            "hourglass_settings" => {
                res.set("FileDescription", "Hourglass.Settings");
                res.set("InternalName", "Hourglass.Settings");
                res.set("OriginalFilename", "hourglass_settings.exe");
            }
            _ => {
                res.set("FileDescription", "Hourglass Overlay");
                res.set("InternalName", "HourglassOverlay");
            }
        }

        if let Err(e) = res.compile() {
            eprintln!("Warning: Failed to compile Windows resources: {}", e);
        }
    }
}
