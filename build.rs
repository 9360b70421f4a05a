use std::env;

// Deployment values baked into the firmware, with the fallback used when the
// variable is not set in the build environment.
const DEPLOYMENT_ENV: [(&str, &str); 5] = [
    ("WIFI_SSID", ""),
    ("WIFI_PASSWORD", ""),
    ("COLLECTOR_HOST", "192.168.1.11"),
    ("COLLECTOR_PORT", "5001"),
    ("COLLECTOR_PATH", "/submit_data"),
];

fn main() {
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    for (key, fallback) in DEPLOYMENT_ENV {
        println!("cargo:rerun-if-env-changed={}", key);
        match env::var(key) {
            Ok(value) => {
                println!("cargo:rustc-env={}={}", key, value);
                if key != "WIFI_PASSWORD" {
                    println!("cargo:warning=Using {} from environment: {}", key, value);
                }
            }
            Err(_) => println!("cargo:rustc-env={}={}", key, fallback),
        }
    }
}
