mod test_peer_sends_message;
mod test_send_to_unknown_peer;
