mod test_missing_outbound_file;
mod test_peer_sends_file;
